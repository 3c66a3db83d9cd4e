pub mod gacha_draw;
