//! Adapter tests against mock vendor HTTP servers.

mod claude_adapter;
mod mock_server;
mod openai_adapter;
