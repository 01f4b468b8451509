pub mod storage;
pub mod cart {
    pub mod entity;
    pub mod repository;
}
pub mod wishlist {
    pub mod repository;
}
