use std::sync::atomic::{AtomicBool, Ordering};

use business::domain::checkout::services::AuthSession;

/// Sign-in flag owned by the host application and read by checkout.
#[derive(Debug, Default)]
pub struct SharedSession {
    authenticated: AtomicBool,
}

impl SharedSession {
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
        }
    }

    pub fn sign_in(&self) {
        self.authenticated.store(true, Ordering::Release);
    }

    pub fn sign_out(&self) {
        self.authenticated.store(false, Ordering::Release);
    }
}

impl AuthSession for SharedSession {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }
}
