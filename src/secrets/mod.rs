mod store;

pub use store::{
    credentials_path, delete_credentials, delete_credentials_at, get_credentials,
    get_credentials_at, store_credentials, store_credentials_at,
};
