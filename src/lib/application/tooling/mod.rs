//! Sessions with MCP tool servers and the manager that owns them.

mod error;
mod interface;
mod manager;
mod session;
mod transport;


pub use error::{ConnectionError, TeardownError, ToolInvokeError};
pub use interface::ToolServerInterface;
pub use manager::ServerManager;
pub use session::{McpSession, ToolOutput};
pub use transport::{MessageSink, Transport};
