mod testdata;
mod ziptree;
