/// An owned pointer to a TFLite C API object, deleted on drop.
pub(super) struct Handle<T> {
    ptr: *mut T,
    delete: unsafe extern "C" fn(*mut T),
}

impl<T> Handle<T> {
    /// Take ownership of `ptr`, or return `None` if the C API handed back null.
    pub(super) fn new(ptr: *mut T, delete: unsafe extern "C" fn(*mut T)) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr, delete })
        }
    }

    pub(super) fn as_ptr(&self) -> *mut T {
        self.ptr
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        // SAFETY: ptr is non-null and owned exclusively by this handle
        unsafe { (self.delete)(self.ptr) }
    }
}
