/// Capability check against the external sign-in backend.
pub trait IdentityGate {
    fn is_signed_in(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    signed_in: bool,
}

impl StaticIdentity {
    pub fn new(signed_in: bool) -> Self {
        Self { signed_in }
    }

    pub fn signed_in() -> Self {
        Self::new(true)
    }

    pub fn signed_out() -> Self {
        Self::new(false)
    }
}

impl IdentityGate for StaticIdentity {
    fn is_signed_in(&self) -> bool {
        self.signed_in
    }
}
