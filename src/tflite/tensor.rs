use crate::{
    error::{check_null, tflite_status_to_result, Error},
    tflite_sys,
};
use ndarray::{ArrayView, IntoDimension};
use std::{convert::TryFrom, marker::PhantomData};

fn dim(tensor: *const tflite_sys::TfLiteTensor, index: usize) -> Result<usize, Error> {
    let dims = num_dims(tensor)?;
    if index >= dims {
        return Err(Error::GetDim(index, dims));
    }

    let index = i32::try_from(index).map_err(Error::ConvertUSizeToI32Index)?;
    // SAFETY: tensor is non-null and owned by a live interpreter
    usize::try_from(unsafe { tflite_sys::TfLiteTensorDim(tensor, index) })
        .map_err(Error::ConvertDimI32ToUSize)
}

fn num_dims(tensor: *const tflite_sys::TfLiteTensor) -> Result<usize, Error> {
    // SAFETY: tensor is non-null and owned by a live interpreter
    usize::try_from(unsafe { tflite_sys::TfLiteTensorNumDims(tensor) })
        .map_err(Error::ConvertDimI32ToUSize)
}

/// A safe wrapper around TfLiteTensor.
pub(crate) struct Tensor<'interp> {
    tensor: *mut tflite_sys::TfLiteTensor,
    len: usize,
    // Data are owned by the interpreter that allocated the tensor.
    _p: PhantomData<&'interp ()>,
}

impl<'interp> Tensor<'interp> {
    pub(super) fn new(tensor: *mut tflite_sys::TfLiteTensor) -> Result<Self, Error> {
        check_null(tensor as *const _).ok_or(Error::CreateTensor)?;
        Ok(Self {
            tensor,
            len: (0..num_dims(tensor)?).try_fold(1, |size, d| Ok(size * dim(tensor, d)?))?,
            _p: PhantomData,
        })
    }

    fn r#type(&self) -> tflite_sys::TfLiteType {
        // SAFETY: self.tensor is guaranteed to be valid
        unsafe { tflite_sys::TfLiteTensorType(self.tensor) }
    }

    fn check_f32(&self) -> Result<(), Error> {
        let typ = self.r#type();
        if typ == tflite_sys::TfLiteType::kTfLiteFloat32 {
            Ok(())
        } else {
            Err(Error::GetTensorSlice(typ))
        }
    }

    pub(crate) fn dim(&self, index: usize) -> Result<usize, Error> {
        dim(self.tensor, index)
    }

    /// View the tensor's data as `f32` values.
    pub(crate) fn as_f32_slice(&self) -> Result<&'interp [f32], Error> {
        self.check_f32()?;
        // SAFETY: the tensor holds `len` f32 values that live as long as the interpreter
        Ok(unsafe {
            std::slice::from_raw_parts(
                tflite_sys::TfLiteTensorData(self.tensor) as *const f32,
                self.len,
            )
        })
    }

    pub(crate) fn as_ndarray<I>(&self, dims: I) -> Result<ArrayView<'interp, f32, I::Dim>, Error>
    where
        I: IntoDimension,
    {
        ArrayView::from_shape(dims.into_dimension(), self.as_f32_slice()?)
            .map_err(Error::ConstructArrayView)
    }

    pub(crate) fn copy_from_f32(&mut self, values: &[f32]) -> Result<(), Error> {
        self.check_f32()?;
        if values.len() != self.len {
            return Err(Error::TensorSize("input", values.len(), self.len));
        }
        tflite_status_to_result(
            // SAFETY: values is valid for its whole byte length, which matches the tensor
            unsafe {
                tflite_sys::TfLiteTensorCopyFromBuffer(
                    self.tensor,
                    values.as_ptr() as _,
                    std::mem::size_of_val(values),
                )
            },
            "failed to copy from input buffer",
        )
    }
}
