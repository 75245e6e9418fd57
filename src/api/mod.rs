// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod submission {
    pub use crate::submission::*;
}

pub mod routes {
    pub use crate::routes::*;
}
