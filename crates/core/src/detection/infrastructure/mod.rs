pub mod cascade_model;
pub mod cascade_xml;
pub mod haar_cascade_detector;
