//! Handwritten digit classifier: a single conv layer, a max pool and a dense
//! head over MNIST. Run once, watch the loss and the test accuracy.

use candle_core::{D, DType, Device, Result, Tensor};
use candle_nn::{
    AdamW, Conv2d, Conv2dConfig, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap,
    conv2d, linear, loss,
};
use rand::seq::SliceRandom;

const NUM_FILTERS: usize = 8;
const FILTER_SIZE: usize = 3;
const POOL_SIZE: usize = 2;
const NUM_CLASSES: usize = 10;
const EPOCHS: usize = 3;
const BATCH_SIZE: usize = 64;

pub struct DigitsModel {
    conv: Conv2d,
    fc: Linear,
}

impl DigitsModel {
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        let conv = conv2d(
            1,
            NUM_FILTERS,
            FILTER_SIZE,
            Conv2dConfig::default(),
            vb.pp("conv"),
        )?;
        // 28x28 -> conv -> 26x26 -> pool -> 13x13
        let fc = linear(NUM_FILTERS * 13 * 13, NUM_CLASSES, vb.pp("fc"))?;
        Ok(Self { conv, fc })
    }
}

impl Module for DigitsModel {
    fn forward(&self, images: &Tensor) -> Result<Tensor> {
        let x = self.conv.forward(images)?;
        let x = x.max_pool2d(POOL_SIZE)?;
        let x = x.flatten_from(1)?;
        self.fc.forward(&x)
    }
}

fn accuracy(model: &DigitsModel, images: &Tensor, labels: &Tensor) -> Result<f32> {
    let logits = model.forward(images)?;
    let predictions = logits.argmax(D::Minus1)?;
    let correct = predictions
        .eq(labels)?
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()?;
    Ok(correct / labels.dims1()? as f32)
}

pub fn run() -> Result<()> {
    let device = Device::Cpu;
    let dataset = candle_datasets::vision::mnist::load()?;

    let n_train = dataset.train_images.dims()[0];
    let n_test = dataset.test_images.dims()[0];
    // pixels come in as [0, 1]; recenter them around zero
    let train_images = (dataset.train_images.reshape((n_train, 1, 28, 28))? - 0.5)?;
    let train_labels = dataset.train_labels.to_dtype(DType::U32)?;
    let test_images = (dataset.test_images.reshape((n_test, 1, 28, 28))? - 0.5)?;
    let test_labels = dataset.test_labels.to_dtype(DType::U32)?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = DigitsModel::new(&vb)?;
    let mut optimizer = AdamW::new(varmap.all_vars(), ParamsAdamW::default())?;

    let batches = n_train / BATCH_SIZE;
    let mut indices: Vec<u32> = (0..n_train as u32).collect();
    for epoch in 0..EPOCHS {
        indices.shuffle(&mut rand::rng());
        let mut loss_sum = 0f32;
        for batch in 0..batches {
            let batch_indices = Tensor::from_slice(
                &indices[batch * BATCH_SIZE..(batch + 1) * BATCH_SIZE],
                BATCH_SIZE,
                &device,
            )?;
            let images = train_images.index_select(&batch_indices, 0)?;
            let labels = train_labels.index_select(&batch_indices, 0)?;
            let logits = model.forward(&images)?;
            let batch_loss = loss::cross_entropy(&logits, &labels)?;
            optimizer.backward_step(&batch_loss)?;
            loss_sum += batch_loss.to_scalar::<f32>()?;
        }
        let test_accuracy = accuracy(&model, &test_images, &test_labels)?;
        println!(
            "epoch: {} avg loss: {:.4} test accuracy: {:5.2}%",
            epoch,
            loss_sum / batches as f32,
            100. * test_accuracy
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_output_shape() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = DigitsModel::new(&vb)?;
        let images = Tensor::zeros((2, 1, 28, 28), DType::F32, &device)?;
        let logits = model.forward(&images)?;
        assert_eq!(logits.dims(), &[2, NUM_CLASSES]);
        Ok(())
    }

    #[test]
    fn accuracy_of_constant_predictions() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = DigitsModel::new(&vb)?;
        let images = Tensor::zeros((4, 1, 28, 28), DType::F32, &device)?;
        let logits = model.forward(&images)?;
        let prediction = logits.argmax(D::Minus1)?.to_vec1::<u32>()?[0];
        let labels = Tensor::full(prediction, 4, &device)?;
        assert_eq!(accuracy(&model, &images, &labels)?, 1.);
        Ok(())
    }
}
