//! Ports - 抽象化レイヤー
//!
//! 各 trait は core の外との継ぎ目。
//!
//! - **Gateway / GatewaySession**: ウェアハウスクライアント
//! - **ConnectionResolver**: connection id の裏にある接続情報
//! - **Reporter**: 終了した attempt の報告先
//! - **Clock / IdGenerator**: テストを決定的にするための時刻と ID

pub mod clock;
pub mod connection;
pub mod gateway;
pub mod id_generator;
pub mod reporter;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connection::{Connection, ConnectionResolver};
pub use self::gateway::{Gateway, GatewaySession};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::reporter::Reporter;
