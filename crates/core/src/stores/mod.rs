pub mod pinecone;

pub use pinecone::PineconeIndex;
