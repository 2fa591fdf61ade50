pub(crate) mod training_summary;
