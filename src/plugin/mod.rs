//! Transform script plugins
//!
//! Tags may ship a `<tag>.jsonnet` script. Scripts are evaluated by an
//! external interpreter and answer one of four actions:
//!
//! | Action | Sent | Returned |
//! |--------|------|----------|
//! | `metadata` | `action` | tag description |
//! | `vars_default` | `action`, `user_data` | default variables |
//! | `vars_override` | `action`, `user_data` | variable overrides |
//! | `docker_override` | `action`, `user_data`, `docker_file` | compose document |

mod chain;
mod interpreter;
mod protocol;

pub use chain::{tag_user_data, TransformChain, TransformStep};
pub use interpreter::{Interpreter, JsonnetInterpreter};
pub use protocol::{decode_response, TagMetadata, TransformAction, TransformRequest, TransformResponse};
