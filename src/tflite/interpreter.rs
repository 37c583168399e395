use crate::{
    error::{check_null, tflite_status_to_result, Error},
    tflite::{handle::Handle, Tensor},
    tflite_sys,
};
use std::{convert::TryFrom, ffi::CString, os::unix::ffi::OsStrExt, path::Path};
use tracing::instrument;

pub(crate) struct Interpreter {
    // Fields drop in order: the interpreter must go before the model and
    // options it was built from.
    interpreter: Handle<tflite_sys::TfLiteInterpreter>,
    _options: Handle<tflite_sys::TfLiteInterpreterOptions>,
    _model: Handle<tflite_sys::TfLiteModel>,
}

impl Interpreter {
    /// Load the model at `path` and allocate its tensors.
    #[instrument(name = "Interpreter::new", skip(path), fields(path = %path.display()))]
    pub(crate) fn new(path: &Path, num_threads: i32) -> Result<Self, Error> {
        let path = CString::new(path.as_os_str().as_bytes()).map_err(Error::PathToCString)?;
        let model = Handle::new(
            // SAFETY: path is a valid NUL terminated string
            unsafe { tflite_sys::TfLiteModelCreateFromFile(path.as_ptr()) },
            tflite_sys::TfLiteModelDelete,
        )
        .ok_or(Error::GetModelFromFile)?;

        let options = Handle::new(
            // SAFETY: returns a valid pointer or null
            unsafe { tflite_sys::TfLiteInterpreterOptionsCreate() },
            tflite_sys::TfLiteInterpreterOptionsDelete,
        )
        .ok_or(Error::CreateOptions)?;
        // SAFETY: options is a live handle
        unsafe { tflite_sys::TfLiteInterpreterOptionsSetNumThreads(options.as_ptr(), num_threads) };

        let interpreter = Handle::new(
            // SAFETY: model and options are live handles
            unsafe { tflite_sys::TfLiteInterpreterCreate(model.as_ptr(), options.as_ptr()) },
            tflite_sys::TfLiteInterpreterDelete,
        )
        .ok_or(Error::CreateInterpreter)?;

        tflite_status_to_result(
            // SAFETY: interpreter is a live handle
            unsafe { tflite_sys::TfLiteInterpreterAllocateTensors(interpreter.as_ptr()) },
            "failed to allocate tensors",
        )?;

        Ok(Self {
            interpreter,
            _options: options,
            _model: model,
        })
    }

    pub(crate) fn invoke(&mut self) -> Result<(), Error> {
        tflite_status_to_result(
            // SAFETY: self.interpreter is a live handle
            unsafe { tflite_sys::TfLiteInterpreterInvoke(self.interpreter.as_ptr()) },
            "model invocation failed",
        )
    }

    pub(crate) fn get_input_tensor(&mut self, index: usize) -> Result<Tensor<'_>, Error> {
        let index = i32::try_from(index).map_err(Error::ConvertUSizeToI32Index)?;
        // SAFETY: self.interpreter is a live handle
        let tensor =
            unsafe { tflite_sys::TfLiteInterpreterGetInputTensor(self.interpreter.as_ptr(), index) };
        if tensor.is_null() {
            return Err(Error::GetInputTensor);
        }
        Tensor::new(tensor)
    }

    pub(crate) fn get_output_tensor(&self, index: usize) -> Result<Tensor<'_>, Error> {
        let index = i32::try_from(index).map_err(Error::ConvertUSizeToI32Index)?;
        // SAFETY: self.interpreter is a live handle
        let tensor = check_null(unsafe {
            tflite_sys::TfLiteInterpreterGetOutputTensor(self.interpreter.as_ptr(), index)
        })
        .ok_or(Error::GetOutputTensor)?;
        // output tensors are only ever read through the returned Tensor
        Tensor::new(tensor as *mut _)
    }
}
