mod gacha_draw_repo;

pub use gacha_draw_repo::GachaDrawRepo;
