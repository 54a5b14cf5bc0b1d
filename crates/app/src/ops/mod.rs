pub mod connect;
pub mod disconnect;
pub mod download;
pub mod init;
pub mod list;
pub mod record;
pub mod status;
pub mod upload;
pub mod verify;
pub mod version;
pub mod watch;

pub use connect::Connect;
pub use disconnect::Disconnect;
pub use download::Download;
pub use init::Init;
pub use list::List;
pub use record::Record;
pub use status::Status;
pub use upload::Upload;
pub use verify::Verify;
pub use version::Version;
pub use watch::Watch;
