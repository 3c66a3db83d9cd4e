pub mod gacha;
pub mod signed_urls;
