//! Courseware core: pure state machines, routing rules and view-model helpers.
mod effect;
mod metadata;
mod msg;
mod playback;
mod routing;
mod state;
mod update;
mod upload;
mod view_model;

pub use effect::Effect;
pub use metadata::{ContentKind, MetadataError, ModuleForm, ModuleMetadata};
pub use msg::Msg;
pub use playback::{SeekGuard, MAX_SEEK_AHEAD_SECS};
pub use routing::{
    CacheGenerations, CachePolicy, RoutingRules, FALLBACK_DOCUMENT, PRECACHE_PATHS,
    STATIC_CACHE_PREFIX,
};
pub use state::{AppState, JobId};
pub use update::update;
pub use upload::{
    UploadJob, UploadPhase, PERCENT_COMPLETED, PERCENT_FINALIZING, PERCENT_INITIATED,
    PERCENT_STARTED,
};
pub use view_model::{AppViewModel, RejectedSubmission, UploadRowView};
