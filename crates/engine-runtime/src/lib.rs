pub mod error;

pub mod execution {
    pub mod executor;
    pub mod factory;
}
