pub mod structs;
pub mod hours;
pub mod eastmoney;
pub mod news;
pub mod sentiment;

pub use structs::{FeedDigest, HistoryBar, StockQuote};
pub use eastmoney::EastMoneyClient;
pub use news::NewsCollector;
