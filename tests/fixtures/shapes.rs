pub mod shapes {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    pub struct BaseType {
        pub name: String,
    }

    #[derive(Serialize, Deserialize)]
    pub struct SubType1 {
        pub name: String,
        pub sides: u32,
    }

    #[derive(Serialize, Deserialize)]
    pub struct SubType2 {
        pub name: String,
        pub radius: f64,
        pub parent: Option<Box<BaseType>>,
    }
}
