// Domain-layer modules and shared errors/models
pub mod schema {
    pub use crate::schema::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod storage {
    pub use crate::storage::*;
}

pub mod booking {
    pub use crate::booking::*;
}

pub mod wizard {
    pub use crate::wizard::*;
}

pub mod errors {
    pub use crate::errors::*;
}
