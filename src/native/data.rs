use libwebp_sys::WebPData;

/// Output buffer allocated by libwebp.
///
/// Copy it out with [`NativeData::to_vec`]; the native buffer is released on drop.
pub struct NativeData {
    inner: WebPData,
}

impl NativeData {
    pub fn new() -> Self {
        // null pointer and zero size, same as WebPDataInit
        Self {
            inner: WebPData::default(),
        }
    }

    pub fn len(&self) -> usize {
        if self.inner.bytes.is_null() {
            0
        } else {
            self.inner.size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        if self.is_empty() {
            return Vec::new();
        }
        // SAFETY: libwebp guarantees `bytes` points to `size` initialized bytes,
        // which stay alive until WebPDataClear in our Drop
        unsafe { std::slice::from_raw_parts(self.inner.bytes, self.inner.size) }.to_vec()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut WebPData {
        &mut self.inner
    }
}

impl Default for NativeData {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeData {
    fn drop(&mut self) {
        // SAFETY: `bytes` is either null or a buffer libwebp allocated for us
        unsafe { libwebp_sys::WebPDataClear(&mut self.inner) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_data_copies_to_empty_vec() {
        let data = NativeData::new();
        assert!(data.is_empty());
        assert_eq!(data.to_vec(), Vec::<u8>::new());
    }
}
