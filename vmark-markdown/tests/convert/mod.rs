//! Tree converter tests over parsed markdown.

mod runs;
