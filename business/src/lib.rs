pub mod application {
    pub mod retry;
    pub mod cart {
        pub mod store;
    }
    pub mod catalog {
        pub mod sync;
    }
    pub mod checkout {
        pub mod orchestrator;
    }
    pub mod payment {
        pub mod processor;
    }
    pub mod wishlist {
        pub mod store;
    }
}

pub mod domain {
    pub mod errors;
    pub mod logger;
    pub mod retry;
    pub mod cart {
        pub mod errors;
        pub mod events;
        pub mod model;
        pub mod repository;
    }
    pub mod catalog {
        pub mod errors;
        pub mod index;
        pub mod model;
        pub mod services;
    }
    pub mod checkout {
        pub mod errors;
        pub mod model;
        pub mod services;
        pub mod validation;
    }
    pub mod identity {
        pub mod model;
        pub mod normalizer;
    }
    pub mod payment {
        pub mod errors;
        pub mod machine;
        pub mod model;
        pub mod services;
    }
    pub mod shared {
        pub mod clock;
        pub mod value_objects;
    }
}
