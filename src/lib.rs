pub mod timelapse_core;
