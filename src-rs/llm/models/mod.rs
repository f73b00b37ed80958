// Provider request shaping and response extraction

pub mod provider_handle;
pub mod provider_base;

pub mod completion;
pub mod conversational;
pub mod instruction;
