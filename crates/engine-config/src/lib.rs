pub mod error;
pub mod templates;

pub mod settings {
    pub mod task;
    pub mod validator;
}
