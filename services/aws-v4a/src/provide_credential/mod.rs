mod env;
pub use env::EnvCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;

mod symmetric;
pub use symmetric::SymmetricCredentialAdaptor;
