//! The fixed MNIST convnet and its configuration.

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig, Conv2dRecord},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, LinearRecord,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

const CONV1_CHANNELS: usize = 32;
const CONV2_CHANNELS: usize = 64;
const KERNEL: usize = 3;

/// Architecture hyper-parameters. The defaults describe the served network.
#[derive(Config, Debug)]
pub struct NetConfig {
    #[config(default = 1)]
    pub in_channels: usize,
    /// Height and width of the square input image.
    #[config(default = 28)]
    pub image_size: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 0.25)]
    pub dropout_conv: f64,
    #[config(default = 0.5)]
    pub dropout_fc: f64,
}

impl NetConfig {
    /// Input shape of a single example as `[channels, height, width]`.
    pub fn input_shape(&self) -> [usize; 3] {
        [self.in_channels, self.image_size, self.image_size]
    }

    /// Width of the flattened feature map fed to `fc1`.
    pub fn flattened_features(&self) -> usize {
        // Two valid 3x3 convolutions followed by a 2x2/2 pool.
        let side = self.image_size.saturating_sub(2 * (KERNEL - 1)) / 2;
        CONV2_CHANNELS * side * side
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Net<B> {
        Net {
            conv1: Conv2dConfig::new([self.in_channels, CONV1_CHANNELS], [KERNEL, KERNEL])
                .init(device),
            conv2: Conv2dConfig::new([CONV1_CHANNELS, CONV2_CHANNELS], [KERNEL, KERNEL])
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout1: DropoutConfig::new(self.dropout_conv).init(),
            dropout2: DropoutConfig::new(self.dropout_fc).init(),
            fc1: LinearConfig::new(self.flattened_features(), self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
        }
    }
}

/// Convolutional classifier producing per-class log probabilities.
///
/// Field names follow the PyTorch `state_dict` keys so checkpoints exported
/// from the training code load without remapping. On a backend without
/// autodiff the dropout layers are the identity, which is the inference-only
/// mode the server relies on.
#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool: MaxPool2d,
    dropout1: Dropout,
    dropout2: Dropout,
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> Net<B> {
    /// # Shapes
    ///   - Images `[batch, channels, height, width]`
    ///   - Output `[batch, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(images));
        let x = relu(self.conv2.forward(x));
        let x = self.pool.forward(x);
        let x = self.dropout1.forward(x);
        let x = x.flatten::<2>(1, 3);
        let x = relu(self.fc1.forward(x));
        let x = self.dropout2.forward(x);

        log_softmax(self.fc2.forward(x), 1)
    }

    /// Compare every parameter of `record` with this network's shapes.
    pub(crate) fn check_record(&self, record: &NetRecord<B>) -> Result<(), String> {
        check_conv("conv1", &self.conv1, &record.conv1)?;
        check_conv("conv2", &self.conv2, &record.conv2)?;
        check_linear("fc1", &self.fc1, &record.fc1)?;
        check_linear("fc2", &self.fc2, &record.fc2)
    }
}

fn check_conv<B: Backend>(
    name: &str,
    module: &Conv2d<B>,
    record: &Conv2dRecord<B>,
) -> Result<(), String> {
    expect_dims(&format!("{name}.weight"), module.weight.dims(), record.weight.dims())?;
    expect_bias(name, module.bias.as_ref(), record.bias.as_ref())
}

fn check_linear<B: Backend>(
    name: &str,
    module: &Linear<B>,
    record: &LinearRecord<B>,
) -> Result<(), String> {
    expect_dims(&format!("{name}.weight"), module.weight.dims(), record.weight.dims())?;
    expect_bias(name, module.bias.as_ref(), record.bias.as_ref())
}

fn expect_bias<B: Backend>(
    name: &str,
    expected: Option<&Param<Tensor<B, 1>>>,
    actual: Option<&Param<Tensor<B, 1>>>,
) -> Result<(), String> {
    match (expected, actual) {
        (Some(expected), Some(actual)) => {
            expect_dims(&format!("{name}.bias"), expected.dims(), actual.dims())
        }
        (None, None) => Ok(()),
        (Some(_), None) => Err(format!("{name}.bias is missing")),
        (None, Some(_)) => Err(format!("{name}.bias is unexpected")),
    }
}

fn expect_dims<const D: usize>(
    name: &str,
    expected: [usize; D],
    actual: [usize; D],
) -> Result<(), String> {
    if expected == actual {
        Ok(())
    } else {
        Err(format!("{name} has shape {actual:?}, expected {expected:?}"))
    }
}
