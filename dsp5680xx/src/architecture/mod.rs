pub mod dsp5680xx;
