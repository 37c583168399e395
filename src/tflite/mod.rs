mod handle;

mod tensor;
pub(crate) use tensor::Tensor;

mod interpreter;
pub(crate) use interpreter::Interpreter;
