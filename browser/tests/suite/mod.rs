mod driver;
mod util;
