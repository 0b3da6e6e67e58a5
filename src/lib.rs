pub use smashstats_core::*;

#[cfg(feature = "client")]
pub mod client {
    pub use smashstats_client::*;
}

#[cfg(feature = "queue")]
pub mod queue {
    pub use smashstats_queue::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use smashstats_fs::*;
}

#[cfg(feature = "mock")]
pub mod mock {
    pub use smashstats_mock::*;
}

pub mod prelude {
    pub use smashstats_core::prelude::*;

    #[cfg(feature = "client")]
    pub use smashstats_client::{ClientConfig, SessionConfig, SmashStatsClient, UploadSession};

    #[cfg(feature = "queue")]
    pub use smashstats_queue::{Progress, Settings, SyncContext};

    #[cfg(feature = "fs")]
    pub use smashstats_fs::{FileSystemStorage, ReplayDumpParser};

    #[cfg(feature = "mock")]
    pub use smashstats_mock::{AcceptAllServer, InMemoryParser, MockApi, ReplayFixture};
}
