/// Capability handed to presenter-only operations.
///
/// The engine never checks credentials itself: whoever authenticates the
/// presenter (the admin route layer in this crate) mints a token and passes it
/// along, and every presenter operation requires one.
#[derive(Debug, Clone)]
pub struct PresenterToken {
    _private: (),
}

impl PresenterToken {
    /// Mint a token for a caller that has already been authorised.
    pub fn issue() -> Self {
        Self { _private: () }
    }
}
