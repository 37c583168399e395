use crate::{error::Error, tflite};
use opencv::{
    core::{Mat, Size, CV_8UC3},
    imgproc::{cvt_color, resize, COLOR_BGR2RGB, INTER_LINEAR},
    prelude::*,
};
use std::convert::TryFrom;

pub(crate) fn blank(size: Size) -> Result<Mat, Error> {
    Mat::zeros(size.height, size.width, CV_8UC3)
        .and_then(|expr| expr.to_mat())
        .map_err(Error::AllocateFrame)
}

/// Width and height of an NHWC input tensor.
pub(crate) fn input_size(interpreter: &mut tflite::Interpreter) -> Result<Size, Error> {
    let input = interpreter.get_input_tensor(0)?;
    let (height, width) = (input.dim(1)?, input.dim(2)?);
    Ok(Size::new(
        i32::try_from(width).map_err(Error::ConvertUSizeToI32Index)?,
        i32::try_from(height).map_err(Error::ConvertUSizeToI32Index)?,
    ))
}

/// View the pixel bytes of a continuous Mat, every channel of every pixel.
pub(crate) fn mat_bytes(input: &Mat) -> Result<&[u8], Error> {
    let step = input.step1(0).map_err(Error::GetStep1)?
        * input.elem_size1().map_err(Error::GetElemSize1)?;
    let rows = usize::try_from(input.rows()).map_err(Error::ConvertDimI32ToUSize)?;
    let data = input.data().map_err(Error::GetMatData)? as _;
    // SAFETY: a continuous Mat holds `rows` rows of `step` bytes starting at `data`
    Ok(unsafe { std::slice::from_raw_parts(data, step * rows) })
}

/// BGR frame to a model's normalized RGB float input.
pub(crate) struct Preprocess {
    size: Size,
    resized: Mat,
    rgb: Mat,
    input: Vec<f32>,
}

impl Preprocess {
    pub(crate) fn new(size: Size) -> Result<Self, Error> {
        Ok(Self {
            size,
            resized: blank(size)?,
            rgb: blank(size)?,
            input: Vec::new(),
        })
    }

    pub(crate) fn prepare(&mut self, image: &Mat) -> Result<&[f32], Error> {
        resize(image, &mut self.resized, self.size, 0.0, 0.0, INTER_LINEAR)
            .map_err(Error::PrepareInput)?;
        cvt_color(&self.resized, &mut self.rgb, COLOR_BGR2RGB, 0).map_err(Error::PrepareInput)?;

        self.input.clear();
        self.input.extend(
            mat_bytes(&self.rgb)?
                .iter()
                .map(|&value| f32::from(value) / 255.0),
        );
        Ok(&self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use opencv::core::Scalar;

    fn solid(rows: i32, cols: i32, bgr: (f64, f64, f64)) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::new(bgr.0, bgr.1, bgr.2, 0.0))
            .unwrap()
    }

    #[test]
    fn bytes_cover_every_channel() {
        let mat = solid(3, 5, (1.0, 2.0, 3.0));
        let bytes = mat_bytes(&mat).unwrap();
        assert_eq!(bytes.len(), 3 * 5 * 3);
        assert_eq!(&bytes[..6], &[1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn prepare_fills_model_input() {
        let mut preprocess = Preprocess::new(Size::new(4, 2)).unwrap();
        let frame = solid(6, 8, (51.0, 102.0, 255.0));
        let input = preprocess.prepare(&frame).unwrap();

        assert_eq!(input.len(), 4 * 2 * 3);
        // channels swapped to RGB and scaled to [0, 1]
        assert_approx_eq!(input[0], 1.0);
        assert_approx_eq!(input[1], 0.4);
        assert_approx_eq!(input[2], 0.2);
        assert_approx_eq!(input[input.len() - 1], 0.2);
    }

    #[test]
    fn prepare_reuses_its_buffer() {
        let mut preprocess = Preprocess::new(Size::new(2, 2)).unwrap();
        let first = preprocess.prepare(&solid(4, 4, (0.0, 0.0, 0.0))).unwrap().len();
        let second = preprocess.prepare(&solid(3, 7, (9.0, 9.0, 9.0))).unwrap();
        assert_eq!(first, second.len());
        assert_approx_eq!(second[0], 9.0 / 255.0);
    }
}
