//! State and union-territory labels from the state-wise tables (Part I Tables
//! 6, 8 and 29). Misspellings are enumerated exactly as they were printed so
//! they resolve by exact lookup: "Jharkand" (Table 29, 2019-20 onward),
//! "Chattisgarh" and "Tamilnadu" (Table 6).
//!
//! Dadra & Nagar Haveli and Daman & Diu are kept distinct from their 2020
//! merger because older editions report them as separate rows.

pub const STATE_VARIANTS: &[(&str, &str)] = &[
    ("andhra pradesh", "Andhra Pradesh"),
    ("arunachal pradesh", "Arunachal Pradesh"),
    ("assam", "Assam"),
    ("bihar", "Bihar"),
    ("chhattisgarh", "Chhattisgarh"),
    ("chattisgarh", "Chhattisgarh"),
    ("goa", "Goa"),
    ("gujarat", "Gujarat"),
    ("haryana", "Haryana"),
    ("himachal pradesh", "Himachal Pradesh"),
    ("jharkhand", "Jharkhand"),
    ("jharkand", "Jharkhand"),
    ("karnataka", "Karnataka"),
    ("kerala", "Kerala"),
    ("madhya pradesh", "Madhya Pradesh"),
    ("maharashtra", "Maharashtra"),
    ("manipur", "Manipur"),
    ("meghalaya", "Meghalaya"),
    ("mizoram", "Mizoram"),
    ("nagaland", "Nagaland"),
    ("odisha", "Odisha"),
    ("orissa", "Odisha"),
    ("punjab", "Punjab"),
    ("rajasthan", "Rajasthan"),
    ("sikkim", "Sikkim"),
    ("tamil nadu", "Tamil Nadu"),
    ("tamilnadu", "Tamil Nadu"),
    ("telangana", "Telangana"),
    ("tripura", "Tripura"),
    ("uttar pradesh", "Uttar Pradesh"),
    ("uttarakhand", "Uttarakhand"),
    ("uttaranchal", "Uttarakhand"),
    ("west bengal", "West Bengal"),
    ("andaman & nicobar islands", "Andaman & Nicobar Islands"),
    ("andaman and nicobar islands", "Andaman & Nicobar Islands"),
    ("andaman & nicobar", "Andaman & Nicobar Islands"),
    ("chandigarh", "Chandigarh"),
    ("dadra & nagar haveli", "Dadra & Nagar Haveli"),
    ("dadra and nagar haveli", "Dadra & Nagar Haveli"),
    ("daman & diu", "Daman & Diu"),
    ("daman and diu", "Daman & Diu"),
    (
        "dadra & nagar haveli and daman & diu",
        "Dadra & Nagar Haveli and Daman & Diu",
    ),
    (
        "dadra and nagar haveli and daman and diu",
        "Dadra & Nagar Haveli and Daman & Diu",
    ),
    ("delhi", "Delhi"),
    ("nct of delhi", "Delhi"),
    ("jammu & kashmir", "Jammu & Kashmir"),
    ("jammu and kashmir", "Jammu & Kashmir"),
    ("ladakh", "Ladakh"),
    ("lakshadweep", "Lakshadweep"),
    ("puducherry", "Puducherry"),
    ("pondicherry", "Puducherry"),
];
