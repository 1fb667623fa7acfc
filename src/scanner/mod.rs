pub mod change;
pub mod conductor;
pub mod custom;
pub mod document;
pub mod exclusion;
pub mod footnote;
pub mod html;
pub mod resolver;
pub mod store;
pub mod syntax;

pub use change::*;
pub use conductor::*;
pub use custom::*;
pub use document::*;
pub use exclusion::*;
pub use footnote::*;
pub use html::*;
pub use resolver::*;
pub use store::*;
pub use syntax::*;
