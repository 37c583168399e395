#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to open video capture device {0}")]
    OpenCamera(i32, #[source] opencv::Error),

    #[error("video capture device {0} is not available")]
    CameraUnavailable(i32),

    #[error("failed to set video capture property {0}")]
    SetCaptureProperty(i32, #[source] opencv::Error),

    #[error("failed to allocate frame buffer")]
    AllocateFrame(#[source] opencv::Error),

    #[error("failed to read frame")]
    ReadFrame(#[source] opencv::Error),

    #[error("reading frame returned false")]
    FrameUnavailable,

    #[error("failed to mirror frame")]
    MirrorFrame(#[source] opencv::Error),

    #[error("failed to release video capture device")]
    ReleaseCamera(#[source] opencv::Error),

    #[error("display scale factor must be finite and positive, got {0}")]
    InvalidScale(f64),

    #[error("failed to scale dimension {0} by {1}")]
    ScaleDimension(i32, f64),

    #[error("quit key must be a single ASCII character, got {0:?}")]
    InvalidQuitKey(char),

    #[error("right and left hand ports must differ, both are {0}")]
    DuplicatePort(u16),

    #[error("failed to bind UDP socket to {1}")]
    BindSocket(#[source] std::io::Error, std::net::SocketAddr),

    #[error("failed to set UDP socket read timeout")]
    SetReadTimeout(#[source] std::io::Error),

    #[error("failed to receive datagram")]
    ReceiveDatagram(#[source] std::io::Error),

    #[error("malformed hand record: {0}")]
    MalformedRecord(&'static str),

    #[error("failed to parse landmark coordinate {1:?}")]
    ParseCoordinate(#[source] std::num::ParseIntError, String),

    #[error("expected {expected} landmarks, got {found}")]
    LandmarkCount { expected: usize, found: usize },

    #[error("hand record is not valid UTF-8")]
    RecordEncoding(#[source] std::str::Utf8Error),

    #[cfg(feature = "gui")]
    #[error("failed to create window {0:?}")]
    CreateWindow(String, #[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to resize frame for display")]
    ResizeFrame(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to draw line")]
    DrawLine(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to draw circle")]
    DrawCircle(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to show image")]
    ImShow(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed waiting for key press")]
    WaitKey(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to destroy windows")]
    DestroyWindows(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to prepare frame for model input")]
    PrepareInput(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to get Mat step1")]
    GetStep1(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to get Mat elem_size1")]
    GetElemSize1(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to get Mat data")]
    GetMatData(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to crop hand region")]
    CropHand(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to get frame dimensions")]
    GetFrameSize(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to convert Path to CString")]
    PathToCString(#[source] std::ffi::NulError),

    #[cfg(feature = "tflite")]
    #[error("failed to construct model from file: C API returned null pointer")]
    GetModelFromFile,

    #[cfg(feature = "tflite")]
    #[error("failed to create TfLiteInterpreterOptions structure")]
    CreateOptions,

    #[cfg(feature = "tflite")]
    #[error("failed to create interpreter, got null pointer")]
    CreateInterpreter,

    #[cfg(feature = "tflite")]
    #[error("failed to get input tensor: got null pointer instead")]
    GetInputTensor,

    #[cfg(feature = "tflite")]
    #[error("failed to get output tensor: got null pointer instead")]
    GetOutputTensor,

    #[cfg(feature = "tflite")]
    #[error("got null pointer when constructing Tensor")]
    CreateTensor,

    #[cfg(feature = "tflite")]
    #[error("failed to convert usize index to i32 index")]
    ConvertUSizeToI32Index(#[source] std::num::TryFromIntError),

    #[cfg(feature = "tflite")]
    #[error("failed to convert dim i32 to usize")]
    ConvertDimI32ToUSize(#[source] std::num::TryFromIntError),

    #[cfg(feature = "tflite")]
    #[error("dimension index {0} is out of bounds for tensor with dimensions {1}")]
    GetDim(usize, usize),

    #[cfg(feature = "tflite")]
    #[error("tensor type is not valid for converting to slice: {0:?}")]
    GetTensorSlice(crate::tflite_sys::TfLiteType),

    #[cfg(feature = "tflite")]
    #[error("tensor {0} holds {1} values, expected {2}")]
    TensorSize(&'static str, usize, usize),

    #[cfg(feature = "tflite")]
    #[error("failed to construct array view from TfLiteTensor")]
    ConstructArrayView(#[source] ndarray::ShapeError),

    #[cfg(feature = "tflite")]
    #[error("failed to convert landmark coordinate {0} to i32")]
    ConvertCoordinate(f32),

    #[cfg(feature = "tflite")]
    #[error("tflite error: {0}")]
    TfLite(&'static str),
}

/// Check whether a pointer to const T is null.
#[cfg(feature = "tflite")]
pub(crate) fn check_null<T>(ptr: *const T) -> Option<*const T> {
    if ptr.is_null() {
        None
    } else {
        Some(ptr)
    }
}

#[cfg(feature = "tflite")]
pub(crate) fn tflite_status_to_result(
    status: crate::tflite_sys::TfLiteStatus,
    message: &'static str,
) -> Result<(), Error> {
    if status == crate::tflite_sys::TfLiteStatus::kTfLiteOk {
        Ok(())
    } else {
        Err(Error::TfLite(message))
    }
}
