pub mod error;
pub mod source;

pub mod file {
    pub mod error;
    pub(crate) mod paging;

    pub mod csv {
        pub mod source;
    }

    pub mod jsonl {
        pub mod source;
    }
}

pub mod sql {
    pub mod base {
        pub mod client;
        pub mod dialect;
        pub mod error;
        pub mod offsets;
        pub mod source;
    }

    pub mod mysql {
        pub mod client;
        pub mod params;
    }
}

pub mod document {
    pub mod client;
    pub mod error;
    pub mod source;

    pub mod mongo {
        pub mod client;
    }
}
