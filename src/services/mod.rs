mod callback;
mod object_store;
mod sdes;

pub use callback::CallbackClient;
pub use object_store::ObjectStoreClient;
pub use sdes::SdesClient;
