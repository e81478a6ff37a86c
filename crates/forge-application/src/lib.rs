pub mod flashcard_gateway;
pub mod session;
pub mod sync_gateway;

pub use flashcard_gateway::{AmendmentParams, FlashcardGateway, GenerationParams};
pub use session::ForgeSession;
pub use sync_gateway::SyncGateway;
