mod scanner;
mod testdata;
mod ziproundtrip;
