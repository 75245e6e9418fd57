//! External service integrations.

pub mod recaptcha {
    pub use crate::recaptcha::*;
}

pub mod task_client {
    pub use crate::task_client::*;
}

pub mod email {
    pub use crate::email::*;
}

pub mod wizard_client {
    pub use crate::wizard_client::*;
}
