mod alloc_test;
mod program_test;
