use super::error::Error;
use super::types::*;

#[test]
fn parse_elementary_types() {
    assert_eq!("uint".parse::<SolType>(), Ok(SolType::UInt(256)));
    assert_eq!("uint8".parse::<SolType>(), Ok(SolType::UInt(8)));
    assert_eq!("int".parse::<SolType>(), Ok(SolType::Int(256)));
    assert_eq!("int64".parse::<SolType>(), Ok(SolType::Int(64)));
    assert_eq!("bool".parse::<SolType>(), Ok(SolType::Bool));
    assert_eq!("address payable".parse::<SolType>(), Ok(SolType::Address));
    assert_eq!("bytes".parse::<SolType>(), Ok(SolType::Bytes));
    assert_eq!("bytes4".parse::<SolType>(), Ok(SolType::FixedBytes(4)));
    assert_eq!("string".parse::<SolType>(), Ok(SolType::String));
}

#[test]
fn parse_rejects_bad_widths() {
    // Not a multiple of 8, so this is taken for a user defined name.
    assert_eq!("uint7".parse::<SolType>(), Ok(SolType::Named("uint7".to_owned())));
    assert_eq!(
        "uint[x]".parse::<SolType>(),
        Err(Error::UnsupportedType("uint[x]".to_owned()))
    );
    assert!("mapping(uint => )".parse::<SolType>().is_err());
}

#[test]
fn parse_composite_types() {
    assert_eq!(
        "uint[2][]".parse::<SolType>(),
        Ok(SolType::array(SolType::array(SolType::uint256(), Some(2)), None))
    );
    assert_eq!(
        "mapping(address => mapping(uint => bool))".parse::<SolType>(),
        Ok(SolType::mapping(
            SolType::Address,
            SolType::mapping(SolType::uint256(), SolType::Bool)
        ))
    );
    assert_eq!("Token".parse::<SolType>(), Ok(SolType::Named("Token".to_owned())));
}

#[test]
fn display_parses_back() {
    for text in [
        "uint256",
        "int8",
        "bytes32",
        "address",
        "uint256[3]",
        "bool[]",
        "mapping(address => uint256[])",
        "Order",
    ] {
        let ty = text.parse::<SolType>().unwrap();
        assert_eq!(ty.to_string(), text);
    }
}

#[test]
fn classification() {
    assert!(SolType::UInt(8).is_elementary());
    assert!(SolType::UInt(8).is_integer());
    assert!(!SolType::Bool.is_integer());
    assert!(SolType::array(SolType::Bool, None).is_dynamic_array());
    assert!(!SolType::array(SolType::Bool, Some(1)).is_dynamic_array());
    assert!(SolType::String.is_symbolic());
    assert!(!SolType::Named("S".to_owned()).is_elementary());
}
