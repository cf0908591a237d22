//! gateway - 外部クライアントへの型付き呼び出しと、1 回だけ送る Dispatcher

pub mod calls;
pub mod dispatcher;

pub use self::calls::{
    CreateEmptyDatasetCall, CreateEmptyTableCall, CreateExternalTableCall, DeleteDatasetCall,
    GatewayCall, RunQueryCall,
};
pub use self::dispatcher::Dispatcher;
