pub mod build_sequential;
