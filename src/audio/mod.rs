pub mod backend;
pub mod chunk;
pub mod encoding;

pub use backend::{AudioFrame, AudioInput, AudioInputFactory, InputConfig, InputSource, SyntheticInput};
pub use chunk::{ChunkBuffer, EncodedChunk};
pub use encoding::AudioEncoding;
