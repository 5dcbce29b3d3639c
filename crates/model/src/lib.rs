pub mod error;

pub mod core {
    pub mod value;
}

pub mod pagination {
    pub mod cursor;
    pub mod page;
}

pub mod records {
    pub mod record;
    pub mod row;
}

pub mod transform {
    pub mod appendix;
}
