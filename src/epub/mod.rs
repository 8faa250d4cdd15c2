mod writer;

pub use writer::{book_identifier, href_to_id, write_epub, write_epub_to_writer};
