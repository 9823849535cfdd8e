pub mod server;

pub use server::ServerDataSource;
